//! Domain types shared by the cache, the coordinator and the views

pub mod forms;
pub mod ids;
pub mod post;

pub use forms::{
    validate_comment, Gender, ImageChange, ImageUpload, LoginForm, NewPost, PasswordChange,
    PostEdit, SignupForm,
};
pub use ids::{CommentId, PostId, UserId};
pub use post::{Author, Comment, Post};
