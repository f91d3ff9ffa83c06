pub mod booking;
pub mod car;
pub mod client;
pub mod ocr;
pub mod scan;
pub mod status;
pub mod upload;

pub use booking::*;
pub use car::*;
pub use client::*;
pub use ocr::*;
pub use scan::*;
pub use status::*;
pub use upload::*;
