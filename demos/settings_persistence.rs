//! Persists a settings field to a JSON file from an ordinary listener.
use std::{
    env,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use cellstore::*;

fn defaults() -> Value {
    json!({ "theme": "light", "font_size": 14 })
}

/// Reads the saved settings. A missing, unreadable or non-object file yields the defaults.
fn load(path: &Path) -> Value {
    let Ok(file) = File::open(path) else {
        return defaults();
    };
    match serde_json::from_reader::<_, Value>(BufReader::new(file)) {
        Ok(settings @ Value::Object(_)) => settings,
        _ => defaults(),
    }
}

fn save(path: &Path, settings: &Value) -> Result<(), ListenerError> {
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut w, settings)?;
    w.flush()?;
    Ok(())
}

fn main() -> Result<(), StoreError> {
    let path: PathBuf = env::temp_dir().join("cellstore_settings.json");
    let store = create_store(state! { "settings" => load(&path) }, None)
        .try_action("set_theme", |s, args| {
            let mut settings = match &s["settings"] {
                settings @ Value::Object(_) => settings.clone(),
                _ => defaults(),
            };
            settings["theme"] = args.require::<String>(0)?.into();
            Ok(patch! { "settings" => settings })
        })
        .build();

    let _persist = store.try_subscribe({
        let path = path.clone();
        move |next, prev| {
            if next.field("settings") == prev.field("settings") {
                return Ok(());
            }
            save(&path, &next["settings"])
        }
    });

    let set_theme = store.use_actions(|a| a.action("set_theme"))?;
    set_theme.call(args!["dark"])?;

    println!("{}", fs::read_to_string(&path).unwrap_or_default());
    Ok(())
}
