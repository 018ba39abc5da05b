use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Query documents of the packaged `match` run, numbered topic1..topic20.
pub const TOPIC_SET: [&str; 20] = [
    "misc.forsale/76057",
    "talk.religion.misc/83561",
    "talk.politics.mideast/75422",
    "sci.electronics/53720",
    "sci.crypt/15725",
    "misc.forsale/76165",
    "talk.politics.mideast/76261",
    "alt.atheism/53358",
    "sci.electronics/54340",
    "rec.motorcycles/104389",
    "talk.politics.guns/54328",
    "misc.forsale/76468",
    "sci.crypt/15469",
    "rec.sport.hockey/54171",
    "talk.religion.misc/84177",
    "rec.motorcycles/104727",
    "comp.sys.mac.hardware/52165",
    "sci.crypt/15379",
    "sci.space/60779",
    "sci.med/59456",
];

pub fn default_topics() -> Vec<String> {
    TOPIC_SET.iter().map(|s| s.to_string()).collect()
}

/// One document id per line; blank lines and `#` comments are skipped.
pub fn parse_topics(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

pub fn load_topics(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|source| Error::Input { path: path.to_path_buf(), source })?;
    Ok(parse_topics(&text))
}
