pub(crate) mod check;
pub(crate) mod grants;
pub(crate) mod users;
