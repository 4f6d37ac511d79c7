pub mod booking;

pub use booking::{BookingEngine, BookingStore, ItemProvider, UserProvider};
