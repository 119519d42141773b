//! Layout and incremental rendering engine for repository structure graphs.
//!
//! Raw node/edge data is normalized into [`graph::GraphData`], laid out by one
//! of the strategies in [`layout`], styled by [`style`] and reconciled into a
//! retained, animated scene by [`scene::SceneRenderer`].

pub mod config;
pub mod expansion;
pub mod graph;
pub mod highlight;
pub mod layout;
pub mod scene;
pub mod style;
pub mod util;
