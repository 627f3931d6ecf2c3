// Unit-style tests for filter and scoping helpers, run as one test binary.
mod unit {
    mod captions;
    mod scope;
    mod text_filters;
}
