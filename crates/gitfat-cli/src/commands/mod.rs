// GitFat - Large File Support for Git
// Copyright (C) 2025 GitFat Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

mod checkout;
mod filter;
mod find;
mod index_filter;
mod init;
mod list;
mod pull;
mod push;
mod status;

pub use checkout::CheckoutCmd;
pub use filter::{FilterCleanCmd, FilterSmudgeCmd};
pub use find::FindCmd;
pub use index_filter::IndexFilterCmd;
pub use init::InitCmd;
pub use list::ListCmd;
pub use pull::PullCmd;
pub use push::PushCmd;
pub use status::StatusCmd;
