pub mod divisions;
pub mod profiles;
pub mod purchased_books;
pub mod subscriptions;
