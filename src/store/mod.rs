pub mod games;
pub mod results;
pub mod selection;

pub use games::GameListStore;
pub use results::ResultsStore;
pub use selection::SelectionController;
