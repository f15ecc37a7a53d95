use std::{
    fs::File,
    io::{stdout, BufReader, Read, Write},
    path::Path,
};

use anyhow::{Context, Result};
use handlebars::handlebars_helper;
use ld2412::{
    analysis::{Pattern, Stats},
    framing::TelemetryRecord,
    Session, SessionConfig, StreamCounters,
};
use serde::Serialize;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

#[derive(Default, Debug, Clone, Serialize)]
struct Rates {
    moving: f64,
    still: f64,
    no_target: f64,
}

#[derive(Default, Debug, Clone, Serialize)]
struct Behavior {
    approach: u64,
    leave: u64,
    stable: u64,
    noise: u64,
    dominant: Option<Pattern>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Info {
    source: String,
    stats: Stats,
    rates: Rates,
    behavior: Behavior,
    counters: StreamCounters,
    latest: Option<TelemetryRecord>,
}

impl Info {
    pub fn new(source: &str, session: &Session) -> Self {
        let stats = session.stats_snapshot();
        let behavior = session.behavior_snapshot();
        Info {
            source: source.to_string(),
            rates: Rates {
                moving: stats.moving_rate(),
                still: stats.still_rate(),
                no_target: stats.no_target_rate(),
            },
            stats,
            behavior: Behavior {
                approach: behavior.approach_count,
                leave: behavior.leave_count,
                stable: behavior.stable_count,
                noise: behavior.noise_count,
                dominant: behavior.dominant(),
            },
            counters: session.stream_counters(),
            latest: session.latest_record(),
        }
    }
}

fn summarize(fpath: &Path, config: SessionConfig) -> Result<Info> {
    let mut reader = BufReader::new(File::open(fpath).context("opening input")?);
    let mut session = Session::new(config).context("creating session")?;

    let mut buf = vec![0u8; 4096];
    loop {
        let n = reader.read(&mut buf).context("reading input")?;
        if n == 0 {
            break;
        }
        session.feed(&buf[..n])?;
    }

    Ok(Info::new(&fpath.to_string_lossy(), &session))
}

pub fn info(fpath: &Path, format: &Format, config: SessionConfig) -> Result<()> {
    let info = summarize(fpath, config)?;
    write_info(&info, format)
}

pub fn write_info(info: &Info, format: &Format) -> Result<()> {
    match format {
        Format::Json => {
            let mut out = stdout();
            serde_json::to_writer_pretty(&mut out, info).context("serializing to json")?;
            writeln!(out).context("writing to stdout")
        }
        Format::Text => {
            let data = render_text(info).context("serializing info")?;
            stdout()
                .write_all(str::as_bytes(&data))
                .context("writing to stdout")
        }
    }
}

fn render_text(info: &Info) -> Result<String> {
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => "-".to_string(),
            _ => v.to_string()
        };
        let num = usize::try_from(num).unwrap_or_default().max(v.len());
        format!("{v:>num$}")
    });
    handlebars_helper!(fixed: |v: f64| format!("{v:.1}"));

    let mut hb = handlebars::Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_helper("lpad", Box::new(left_pad));
    hb.register_helper("fixed", Box::new(fixed));
    hb.register_template_string("info", TEXT_TEMPLATE)
        .context("registering template")?;

    hb.render("info", &info).context("rendering text")
}

const TEXT_TEMPLATE: &str = r"{{ source }}
===============================================================
Frames:       {{ lpad 8 stats.total_frames }}
Moving:       {{ lpad 8 stats.moving_detections }}  {{ lpad 5 (fixed rates.moving) }}%
Still:        {{ lpad 8 stats.still_detections }}  {{ lpad 5 (fixed rates.still) }}%
No target:    {{ lpad 8 stats.no_target_count }}  {{ lpad 5 (fixed rates.no_target) }}%
Distance:     min {{ lpad 0 stats.min_detection_distance_cm }}cm  max {{ stats.max_detection_distance_cm }}cm
Energy:       moving avg {{ fixed stats.avg_moving_energy }} max {{ stats.max_moving_energy }}, still avg {{ fixed stats.avg_still_energy }} max {{ stats.max_still_energy }}
---------------------------------------------------------------
Behavior      Approach     Leave    Stable     Noise  Dominant
---------------------------------------------------------------
              {{ lpad 8 behavior.approach }}  {{ lpad 8 behavior.leave }}  {{ lpad 8 behavior.stable }}  {{ lpad 8 behavior.noise }}  {{ #if behavior.dominant }}{{ behavior.dominant }}{{ else }}none{{ /if }}
---------------------------------------------------------------
Bytes:        {{ lpad 8 counters.bytes_received }}
Telemetry:    {{ lpad 8 counters.telemetry_frames }}
Commands:     {{ lpad 8 counters.command_frames }}
Sync misses:  {{ lpad 8 counters.sync_misses }}
Malformed:    {{ lpad 8 counters.malformed_frames }}
Truncations:  {{ lpad 8 counters.buffer_truncations }}
";
