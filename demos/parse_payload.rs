use dlid_scanner::aamva;

/// Text decoded from the PDF417 symbol on the back of a license.
const PAYLOAD: &str = "@<LF><RS><CR>ANSI 636014090001DL00410201DLDAQD1234562<LF>DCSSAMPLE<LF>DACALEXANDER<LF>DADJOSEPH<LF>DBD08292017<LF>DBB08311977<LF>DBA08312022<LF>DBC1<LF>DAU068 IN<LF>DAYBRO<LF>DAG2570 24TH STREET<LF>DAIANYTOWN<LF>DAJCA<LF>DAK958220000<LF>DCF83D9BN217QO983LCG<LF>DCGUSA<CR>";

fn main() {
    // A payload file can be given in place of the built-in sample.
    let payload = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path).unwrap(),
        None => PAYLOAD.to_owned(),
    };

    let record = aamva::parse(&payload);
    eprintln!(
        "{} fields, fingerprint: {}",
        record.len(),
        hex::encode(record.fingerprint())
    );

    println!("{}", record.to_json_pretty())
}
