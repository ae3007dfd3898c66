// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod controller;
pub mod ids;
pub mod model;
pub mod persistence;
pub mod row;
pub mod state;
pub mod table;

pub use controller::*;
pub use ids::*;
pub use model::*;
pub use persistence::*;
pub use row::*;
pub use state::*;
pub use table::*;
