pub mod editor;

pub use editor::{ConfigEditor, Notice, NoticeKind};
