use isotherm::{
    MapConfig, Palette, Pipeline,
    progress::{ProgressMsg, closure_sink},
};
use std::path::PathBuf;

// A handful of stations around south-eastern Australia: id, lat, lon, elevation, temperature.
const DEMO_STATIONS: &str = "\
station,lat,lon,elevation,temperature
BNE,-27.48,153.04,8,24.1
SYD,-33.86,151.21,39,19.8
CBR,-35.30,149.20,578,12.3
MEL,-37.81,144.96,31,15.2
ADL,-34.92,138.60,48,17.4
HBA,-42.88,147.33,51,11.0
ASP,-23.80,133.89,546,28.7
MIL,-34.23,142.08,50,21.5
DUB,-32.22,148.57,284,18.9
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Use the CSV given on the command line, otherwise write the demo stations out
    let input = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let path = std::env::temp_dir().join("isotherm_demo_stations.csv");
            std::fs::write(&path, DEMO_STATIONS)?;
            path
        }
    };

    let out_dir = std::env::temp_dir();
    let map_json = out_dir.join("isotherm_demo_map.json");
    let field_csv = out_dir.join("isotherm_demo_field.csv");

    // Default settings: Mercator, 60 km grid, linear kernel with 60000 smoothing
    let config = MapConfig::default();

    let (sink, listener) = closure_sink(16, |msg| match msg {
        ProgressMsg::ObservationsCleaned {
            kept,
            dropped_invalid,
            duplicates,
        } => println!("cleaned: {kept} kept, {dropped_invalid} invalid, {duplicates} duplicates"),
        ProgressMsg::GridBuilt { nx, ny, spacing } => {
            println!("grid: {nx} x {ny} nodes at {spacing} m")
        }
        ProgressMsg::SystemSolved { num_points, method } => {
            println!("solved {num_points} stations with {method:?}")
        }
        ProgressMsg::FieldEvaluated { nodes, missing } => {
            println!("evaluated {nodes} nodes ({missing} missing)")
        }
        ProgressMsg::IsolinesTraced { levels, polylines } => {
            println!("traced {polylines} isolines over {levels} levels")
        }
        ProgressMsg::Message { message } => println!("{message}"),
    });

    let map = Pipeline::new(config)?
        .progress_callback(sink)
        .run_csv_to_files(&input, &map_json, &field_csv)?;

    // Dropping the pipeline released the sink, so the listener drains and exits
    listener.join().map_err(|_| "progress listener panicked")?;

    let palette = Palette::default();
    let colored = map
        .node_colors(&palette)?
        .into_iter()
        .filter(Option::is_some)
        .count();

    println!(
        "{} bands, {} of {} nodes coloured",
        map.n_bands(),
        colored,
        map.grid.num_nodes()
    );
    println!("map written to {}", map_json.display());
    println!("field written to {}", field_csv.display());

    Ok(())
}
