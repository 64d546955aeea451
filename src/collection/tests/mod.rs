mod tests_set_ops;
