pub mod add;
pub mod connect;
pub mod disconnect;
pub mod done;
pub mod events;
pub mod remove;
pub mod status;
pub mod sync;

use anyhow::Result;
use jobdeck_core::Store;

pub(crate) fn open_store() -> Result<Store> {
    Ok(Store::open(jobdeck_core::config::db_path()?)?)
}
