use accident_ingest::REQUIRED_COLUMNS;
use chrono::{Duration, NaiveDate};
use clap::{Arg, Command};
use std::io::{self, Write};

const ROAD_TYPES: [&str; 4] = [
    "Single carriageway",
    "Dual carriageway",
    "Roundabout",
    "One way street",
];
const WEATHER: [&str; 4] = [
    "Fine without high winds",
    "Raining without high winds",
    "Fog or mist",
    "Snowing without high winds",
];
const LIGHT: [&str; 3] = [
    "Daylight: Street light present",
    "Darkness: Street lights present and lit",
    "Darkness: No street lighting",
];
const SPEED_LIMITS: [u32; 5] = [20, 30, 40, 60, 70];

fn cli() -> Command {
    Command::new("gen")
        .about("Write synthetic accident rows as CSV to stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("no_header")
                .long("no-header")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("drop")
                .long("drop")
                .help("Leave a required column out of the file")
                .value_parser(clap::builder::PossibleValuesParser::new(REQUIRED_COLUMNS))
                .action(clap::ArgAction::Append),
        )
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let rows: u64 = matches.get_one("rows").copied().unwrap_or_default();
    let with_header = !matches.get_flag("no_header");
    let dropped: Vec<String> = matches
        .get_many::<String>("drop")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    let columns: Vec<usize> = (0..REQUIRED_COLUMNS.len())
        .filter(|&i| !dropped.iter().any(|d| d == REQUIRED_COLUMNS[i]))
        .collect();

    let mut out = io::BufWriter::new(io::stdout().lock());

    if with_header {
        let header: Vec<&str> = columns.iter().map(|&i| REQUIRED_COLUMNS[i]).collect();
        writeln!(&mut out, "{}", header.join(","))?;
    }

    let epoch = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    // Deterministic data spread over London-ish coordinates
    for i in 0..rows {
        let n = i as usize;
        let fields = [
            (epoch + Duration::days((i % 1461) as i64)).to_string(),
            format!("{:.4}", -0.5 + (i % 997) as f64 / 1000.0),
            format!("{:.4}", 51.3 + (i % 613) as f64 / 1000.0),
            (1 + n % 3).to_string(),
            (1 + n % 4).to_string(),
            (n % 3).to_string(),
            ROAD_TYPES[n % ROAD_TYPES.len()].to_string(),
            SPEED_LIMITS[n % SPEED_LIMITS.len()].to_string(),
            WEATHER[n % WEATHER.len()].to_string(),
            LIGHT[n % LIGHT.len()].to_string(),
        ];
        let row: Vec<&str> = columns.iter().map(|&c| fields[c].as_str()).collect();
        writeln!(&mut out, "{}", row.join(","))?;
        if i % 10_000 == 0 {
            out.flush()?;
        } // keep buffers moving on huge runs
    }

    out.flush()?;
    Ok(())
}
