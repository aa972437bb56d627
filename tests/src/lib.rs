mod test_annotation;
mod test_dump_restore;
mod test_migrate;
mod test_reconcile;
