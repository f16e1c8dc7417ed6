pub mod app;
pub mod category_repo;
pub mod clock;
pub mod config;
pub mod error;
pub mod fields;
pub mod models;
pub mod parser;
pub mod stats;
pub mod store;
pub mod task_repo;
pub mod ui;
pub mod validate;
pub mod view;

pub use category_repo::CategoryRepository;
pub use error::{RepoError, StoreError};
pub use models::{Category, NewCategory, NewTask, Priority, Task, TaskPatch};
pub use store::{MemoryStore, RecordStore, RemoteStore};
pub use task_repo::TaskRepository;
pub use view::{filter_and_sort, View};
