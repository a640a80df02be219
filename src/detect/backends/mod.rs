pub mod scene;
pub mod script;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use scene::SceneBackend;
pub use script::ScriptBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;
