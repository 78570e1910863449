pub(crate) mod auth;
pub(crate) mod categories;
pub(crate) mod companion;
pub(crate) mod errors;
pub(crate) mod exam;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod mentor;
pub(crate) mod progress;
pub(crate) mod registrations;
pub(crate) mod router;
pub(crate) mod sessions;
pub(crate) mod validation;
