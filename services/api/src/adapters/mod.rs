pub mod db;
pub mod rag;

pub use db::DbAdapter;
pub use rag::RagClient;
