mod documentdb;
mod object_storage;
mod registry;
mod security_group_rules;
mod sweeper;
