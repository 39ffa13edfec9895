mod breakdown;
mod list_cell;
mod output;
mod run;
pub(crate) mod table;

pub(crate) use list_cell::parse_passage_list;
pub(crate) use run::run;
