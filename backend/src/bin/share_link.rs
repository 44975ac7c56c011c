use clap::{Parser, Subcommand};
use runroute::models::Coordinate;
use reqwest::Url;
use runroute::share::{compress_route, decompress_route, is_valid_polyline, share_url};

#[derive(Debug, Parser)]
#[command(author, version, about = "Encode and decode runroute share links")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Encode waypoints given as `lat,lon` pairs
    Encode {
        #[arg(required = true, num_args = 2.., value_parser = parse_point)]
        points: Vec<Coordinate>,
        /// Print a full share URL based at this address instead of the raw string
        #[arg(long)]
        base_url: Option<Url>,
    },
    /// Print the waypoints contained in an encoded route
    Decode { encoded: String },
    /// Exit with an error unless the string is a well-formed route
    Check { encoded: String },
}

fn parse_point(input: &str) -> Result<Coordinate, String> {
    let (lat, lon) = input
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lon but got {input:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("bad latitude in {input:?}"))?;
    let lon: f64 = lon.trim().parse().map_err(|_| format!("bad longitude in {input:?}"))?;
    let point = Coordinate::new(lat, lon);
    if point.is_valid() {
        Ok(point)
    } else {
        Err(format!("{input:?} is outside the valid lat/lon range"))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Args::parse().command {
        Command::Encode { points, base_url } => match base_url {
            Some(base) => println!("{}", share_url(&base, &points)),
            None => println!("{}", compress_route(&points)),
        },
        Command::Decode { encoded } => {
            let points = decompress_route(&encoded);
            if points.is_empty() {
                return Err("not a valid encoded route".into());
            }
            for point in points {
                println!("{:.6},{:.6}", point.lat, point.lon);
            }
        }
        Command::Check { encoded } => {
            if !is_valid_polyline(&encoded) {
                return Err("not a valid encoded route".into());
            }
            println!("ok");
        }
    }
    Ok(())
}
