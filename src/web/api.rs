use serde_json::json;
use tracing::{error, info};

const POEM: &[(tracing::Level, &str)] = &[
    (tracing::Level::INFO, "I met a traveller from an antique land,"),
    (tracing::Level::INFO, "Who said: Two vast and trunkless legs of stone"),
    (tracing::Level::INFO, "Stand in the desert... near them, on the sand,"),
    (tracing::Level::INFO, "Half sunk, a shattered visage lies, whose frown,"),
    (tracing::Level::INFO, "And wrinkled lip, and sneer of cold command,"),
    (tracing::Level::INFO, "Tell that its sculptor well those passions read"),
    (tracing::Level::INFO, "Which yet survive, stamped on these lifeless things,"),
    (tracing::Level::INFO, "The hand that mocked them and the heart that fed;"),
    (tracing::Level::INFO, "And on the pedestal these words appear:"),
    (tracing::Level::ERROR, "'My name is Ozymandias, king of kings;"),
    (tracing::Level::ERROR, "Look on my works, ye Mighty, and despair!'"),
    (tracing::Level::INFO, "Nothing beside remains. Round the decay"),
    (tracing::Level::INFO, "Of that colossal wreck, boundless and bare"),
    (tracing::Level::INFO, "The lone and level sands stretch far away."),
];

/// Logs a poem line by line plus one structured record, so a single request
/// produces a group of application entries under its summary.
pub async fn index() -> &'static str {
    for (level, line) in POEM {
        if *level == tracing::Level::ERROR {
            error!("{}", line);
        } else {
            info!("{}", line);
        }
    }

    let record = json!({
        "author": {
            "firstName": "PERCY",
            "lastName": "SHELLEY"
        },
        "title": "Ozymandias"
    });
    info!("{}", record);

    "ok"
}

pub async fn health_check() -> &'static str {
    "ok"
}
