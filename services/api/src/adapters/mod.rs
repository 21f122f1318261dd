pub mod db;
pub mod memory;
pub mod token;

pub use db::DbAdapter;
pub use memory::MemoryStore;
pub use token::JwtSessionTokens;
