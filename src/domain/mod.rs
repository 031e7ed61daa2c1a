mod expense;
mod integrity;
mod ledger;
mod money;
mod planner;
mod settlement;
mod trip;

pub use expense::*;
pub use integrity::*;
pub use ledger::*;
pub use money::*;
pub use planner::*;
pub use settlement::*;
pub use trip::*;
