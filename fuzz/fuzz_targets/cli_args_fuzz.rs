#![no_main]
use libfuzzer_sys::fuzz_target;

const COMMANDS: [&str; 4] = ["unpack", "pack", "header", "repack"];
const FLAGS: [&str; 5] = ["-f", "--force", "--debug", "--errors", "--silent"];
const EXTENSIONS: [&str; 4] = [".xnb", ".json", "/", ""];

// First byte: bits 0-4 pick global flags, bits 5-6 the subcommand, bit 7
// puts the flags after it. The rest is NUL-separated path stems.
fuzz_target!(|data: &[u8]| {
    let Some((&shape, rest)) = data.split_first() else {
        return;
    };

    let flags: Vec<String> = FLAGS
        .iter()
        .enumerate()
        .filter(|(i, _)| shape & (1 << i) != 0)
        .map(|(_, f)| f.to_string())
        .collect();
    let command = COMMANDS[usize::from(shape >> 5) & 3].to_string();

    let mut args = Vec::new();
    if shape & 0x80 == 0 {
        args.extend(flags.iter().cloned());
        args.push(command);
    } else {
        args.push(command);
        args.extend(flags.iter().cloned());
    }
    for stem in rest.split(|&b| b == 0).take(3) {
        let stem = String::from_utf8_lossy(stem);
        args.push(format!("{stem}{}", EXTENSIONS[stem.len() % EXTENSIONS.len()]));
    }

    xnbkit::cli::fuzz_try_parse_args(&args);
});
