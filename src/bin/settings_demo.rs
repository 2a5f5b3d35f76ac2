use keel::settings::*;

fn main() {
    // Load settings from the default location
    let project_settings = parse_settings(None).unwrap();
    println!("Loaded settings: {:?}", project_settings);
    println!("Validation: {:?}", project_settings.validate());
    println!("Log config: {:?}", project_settings.log_config());

    // Attempt to load from an invalid path (expected to fail)
    let is_err = parse_settings(Some("")).is_err();
    println!("Error on invalid path: {:?}", is_err);

    // Environment overrides, e.g.
    // $ KEEL__JWT__ACCESS_TTL_SECS=60 cargo run --bin settings_demo -- --settings=settings/dev.toml
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref()).unwrap();
    println!("Loaded settings: {:?}", project_settings);
    println!("Validation: {:?}", project_settings.validate());
}
