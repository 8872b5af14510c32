use man::prelude::*;
use std::path::Path;

fn main() {
    let page = Manual::new("pdfjornada")
        .about("extract employee names and weekly hours from PDF files")
        .flag(
            Flag::new()
                .short("-p")
                .long("--plain")
                .help("Force plain text output: one tab-separated row per employee."),
        )
        .flag(
            Flag::new()
                .short("-m")
                .long("--markdown")
                .help("Output as a markdown table (default when terminal detected)."),
        )
        .flag(
            Flag::new()
                .short("-j")
                .long("--json")
                .help("Output the extracted records as a JSON array."),
        )
        .flag(
            Flag::new()
                .short("-e")
                .long("--export")
                .help("Write the PDF report to datos_extraidos.pdf in the current directory."),
        )
        .option(
            Opt::new("FILE")
                .short("-o")
                .long("--output")
                .help("Write the PDF report to FILE."),
        )
        .flag(
            Flag::new()
                .short("-v")
                .long("--verbose")
                .help("Log progress to stderr. Repeat for request details."),
        )
        .flag(
            Flag::new()
                .short("-h")
                .long("--help")
                .help("Show help information."),
        )
        .arg(Arg::new("FILE.pdf..."))
        .custom(
            Section::new("description")
                .paragraph(
                    "pdfjornada reads every PDF given on the command line, combines \
                     their text, and sends it in a single request to the Gemini API, \
                     which returns each employee name and weekly working hours found.",
                )
                .paragraph(
                    "Rows whose weekly hours are 16 or less, or 35 or more, are \
                     marked NOT APPLICABLE. Only the first number of the hours \
                     value is considered.",
                )
                .paragraph(
                    "Image-only PDFs contribute no text and are not an error. A PDF \
                     that cannot be parsed fails the whole run.",
                ),
        )
        .example(
            Example::new()
                .text("Show the employees found in two payroll files")
                .command("pdfjornada enero.pdf febrero.pdf"),
        )
        .example(
            Example::new()
                .text("Export the table as a PDF report")
                .command("pdfjornada --export nomina.pdf"),
        )
        .custom(
            Section::new("environment")
                .paragraph(
                    "\\fBGEMINI_API_KEY\\fR (or \\fBAPI_KEY\\fR) holds the API key and \
                     is required.",
                )
                .paragraph(
                    "\\fBPDFJORNADA_MODEL\\fR, \\fBPDFJORNADA_ENDPOINT\\fR and \
                     \\fBPDFJORNADA_TIMEOUT_SECS\\fR override the model, the API base \
                     URL and the request timeout.",
                )
                .paragraph("\\fBRUST_LOG\\fR overrides the log filter."),
        )
        .custom(Section::new("see also").paragraph("pdftotext(1)"))
        .render();

    // Write to OUT_DIR (standard cargo output directory)
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let out_path = Path::new(&out_dir).join("pdfjornada.1");
    std::fs::write(&out_path, &page).unwrap();

    // Also write to target/man/ so packaging scripts have a stable path
    // that doesn't depend on the hash-based OUT_DIR.
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let man_dir = Path::new(&manifest_dir).join("target").join("man");
    std::fs::create_dir_all(&man_dir).unwrap();
    std::fs::write(man_dir.join("pdfjornada.1"), &page).unwrap();

    println!("cargo::rerun-if-changed=build.rs");
}
