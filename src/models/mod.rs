pub mod booking;
pub mod comment;
pub mod item;
pub mod request;
pub mod user;

pub use booking::{Booking, BookingFilter, BookingState, BookingStatus};
pub use comment::Comment;
pub use item::Item;
pub use request::ItemRequest;
pub use user::User;
