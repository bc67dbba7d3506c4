//! Session controller and view projection for the ragchat front end.

pub mod controller;
pub mod view;

pub use controller::{Artifact, ArtifactKind, ChatController, SubmitOutcome};
pub use view::{View, render};
