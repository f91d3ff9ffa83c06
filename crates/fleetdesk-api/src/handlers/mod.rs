pub mod bookings;
pub mod cars;
pub mod clients;
pub mod documents;
pub mod health;
pub mod mobile_upload;
pub mod ocr;
pub mod upload_tokens;
