//! Data models
//!
//! Database entities (User, Post, Page, Media), the inputs accepted by the
//! services and the pagination types shared by every listing. Everything is
//! serialized camelCase to match the admin frontend.

mod media;
mod page;
mod pagination;
mod post;
mod status;
mod user;

pub use media::{Media, MediaFilter, UpdateMediaInput};
pub use page::{CreatePageInput, Page, PageFilter, UpdatePageInput};
pub use pagination::{ListParams, PagedResult, MAX_PAGE_SIZE};
pub use post::{CreatePostInput, Post, PostFilter, UpdatePostInput};
pub use status::ContentStatus;
pub use user::{Actor, CreateUserInput, UpdateUserInput, User, UserFilter, UserRole};
