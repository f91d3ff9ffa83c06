pub mod qr;
pub mod upload;
