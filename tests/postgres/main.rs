//! Store test suite against PostgreSQL.
//!
//! Needs a reachable database in `CRS_TEST_DATABASE_URL`; every test returns early
//! when it is unset.
//!
//! Run with: CRS_TEST_DATABASE_URL=postgres://... cargo test --test postgres
