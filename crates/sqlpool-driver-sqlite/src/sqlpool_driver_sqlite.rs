//! SQLite database driver implementation

mod connection;
mod driver;

#[cfg(test)]
mod tests;

pub use connection::SqliteConnection;
pub use driver::SqliteDriver;
