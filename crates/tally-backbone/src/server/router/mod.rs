pub(crate) mod ci_test;
pub(crate) mod component;
pub(crate) mod feeder;
pub(crate) mod jobdefinition;
pub(crate) mod permission;
pub(crate) mod role;
pub(crate) mod team;
pub(crate) mod user;
