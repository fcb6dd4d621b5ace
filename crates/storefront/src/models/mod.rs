//! Domain models for storefront.
//!
//! These types represent validated domain objects separate from database row
//! types and from the JSON request/response shapes in `routes/`.

pub mod contact;
pub mod otp;
pub mod product;
pub mod session;
pub mod user;

pub use contact::ContactMessage;
pub use otp::OtpRecord;
pub use product::Product;
pub use session::CurrentUser;
pub use user::User;
