pub mod comment;
pub mod contract;
pub mod controller;
pub mod debounce;
pub mod dispatch;
pub mod editor;
pub mod effects;
pub mod error;
pub mod fill_down;
pub mod layout;
pub mod model;
pub mod navigation;
pub mod popup;
