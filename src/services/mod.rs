//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories. They are
//! responsible for:
//! - Validation and permission rules
//! - Coordinating repositories, the render cache and the upload directory
//! - Translating storage failures into [`ServiceError`]

pub mod content;
pub mod error;
pub mod media;
pub mod page;
pub mod password;
pub mod post;
pub mod token;
pub mod user;

pub use content::ContentRenderer;
pub use error::{ServiceError, ServiceResult};
pub use media::{MediaService, UploadedFile};
pub use page::{PageService, RenderedPage};
pub use password::{hash_password, verify_password};
pub use post::{PostService, RenderedPost};
pub use token::{bearer_token, generate_secret, Claims, TokenError, TokenService};
pub use user::{is_valid_email, LoginResult, UserService};
