#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

//! Headless core for a QR code and barcode generator with a persistent
//! gallery of pinned codes. The shell renders the `ViewModel`, forwards user
//! input as `Event`s and carries out `Storage` and `CodeRenderer` requests.

pub mod app;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod event;
pub mod gallery;
pub mod generator;
pub mod model;
pub mod view;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::Config;
pub use crux_core::{render::Render, App as CruxApp};
pub use error::{AppError, ErrorKind, UserFacingError};
pub use event::Event;
pub use model::{CodeKind, KindFilter, Model, SavedItem};
pub use view::ViewModel;
