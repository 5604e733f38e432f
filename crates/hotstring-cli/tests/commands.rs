use hotstring_cli::cli::Commands;
use hotstring_cli::commands::handle_command;
use hotstring_core::config::HOME_ENV;
use hotstring_core::{HotstringError, Settings, Trigger, TriggerDatabase};
use std::env;
use std::fs;
use tempfile::TempDir;

// Everything runs in one test because the config directory comes from the
// process environment.
#[test]
fn commands_manage_triggers_and_settings() {
    let home = TempDir::new().unwrap();
    env::set_var(HOME_ENV, home.path());
    let database = TriggerDatabase::open_default();

    handle_command(Commands::Add {
        trigger: ":sig".to_string(),
        output: "Regards".to_string(),
        category: Some("Mail".to_string()),
    })
    .unwrap();

    let triggers = database.load().unwrap();
    assert_eq!(
        triggers,
        vec![
            Trigger::new(":hi", "hello world"),
            Trigger::new(":sig", "Regards").with_category("Mail"),
        ]
    );

    let duplicate = handle_command(Commands::Add {
        trigger: ":sig".to_string(),
        output: "again".to_string(),
        category: None,
    });
    assert!(matches!(duplicate, Err(HotstringError::DuplicateTrigger(_))));

    handle_command(Commands::Update {
        trigger: ":sig".to_string(),
        output: "Cheers".to_string(),
        category: None,
    })
    .unwrap();
    assert_eq!(database.find(":sig").unwrap().unwrap().output, "Cheers");
    handle_command(Commands::List { category: None }).unwrap();

    let exported = home.path().join("export.json");
    handle_command(Commands::Export {
        path: exported.clone(),
    })
    .unwrap();

    handle_command(Commands::Delete {
        trigger: ":sig".to_string(),
    })
    .unwrap();
    assert!(database.find(":sig").unwrap().is_none());

    handle_command(Commands::Import {
        path: exported,
        replace: false,
    })
    .unwrap();
    assert_eq!(database.find(":sig").unwrap().unwrap().output, "Cheers");
    assert_eq!(database.load().unwrap().len(), 2);

    let missing = handle_command(Commands::Delete {
        trigger: ":nope".to_string(),
    });
    assert!(matches!(missing, Err(HotstringError::TriggerNotFound(_))));

    handle_command(Commands::Disable).unwrap();
    handle_command(Commands::Speed { value: Some(9) }).unwrap();
    let settings = Settings::load();
    assert!(!settings.enabled);
    assert_eq!(settings.trigger_speed, 9);

    handle_command(Commands::Enable).unwrap();
    assert!(Settings::load().enabled);
    assert!(fs::metadata(home.path().join("settings.json")).is_ok());
}
