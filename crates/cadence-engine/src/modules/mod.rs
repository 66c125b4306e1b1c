// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Concrete optimization modules registered with the controller.
//!
//! Each module wraps one policy or queue, reads its settings from the
//! configuration at init time, and exposes the query surface the host's
//! rendering and update backends consult each frame.

mod culler;
mod lighting;
mod pacer;
mod throttler;

pub use culler::SceneCullerModule;
pub use lighting::LightingBatcherModule;
pub use pacer::FramePacerModule;
pub use throttler::SceneThrottlerModule;
