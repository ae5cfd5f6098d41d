pub mod http;
mod socket;
pub mod temp;

// re-export
pub use socket::next_addr;
