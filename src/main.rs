//! Authorization is a microservice responsible for merchant onboarding
//! and api key authorization.
//! This crate is for running the service from `authorization_lib`. See `authorization_lib` for details.

extern crate authorization_lib;
extern crate env_logger;

fn main() {
    let config = authorization_lib::config::Config::new().expect("Can't load app config!");

    // Prepare sentry integration
    let _sentry = authorization_lib::sentry_integration::init(config.sentry.as_ref());

    // Prepare logger
    env_logger::init();

    authorization_lib::start_server(config, &None, || ());
}
