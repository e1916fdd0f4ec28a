// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Error kinds for the context/span core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("no active context for this task")]
    NoActiveContext,

    #[error("span already ended")]
    AlreadyEnded,

    #[error("span creation failed in replay mode: {0}")]
    ReplayFatal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
