//! Lists sequencer MIDI ports.
//!
//! ```bash
//! cargo run -p seqmidi-io --example list_ports --features alsa-seq
//! cargo run -p seqmidi-io --example list_ports -- --json
//! ```
//!
//! Without `alsa-seq` the example runs on the in-process backend with a
//! couple of fixture devices.

use seqmidi_io::{MidiAccess, PortDescriptor};

fn print_ports(title: &str, ports: &[PortDescriptor]) {
    println!("{} ({}):", title, ports.len());
    for port in ports {
        println!(
            "  {:<8} {:<32} {:<24} {:?}",
            port.id(),
            port.name(),
            port.manufacturer(),
            port.protocol()
        );
    }
}

#[cfg(all(feature = "alsa-seq", target_os = "linux"))]
fn access() -> Box<dyn MidiAccess> {
    Box::new(seqmidi_io::SeqMidiAccess::new(seqmidi_io::AlsaBackend))
}

#[cfg(not(all(feature = "alsa-seq", target_os = "linux")))]
fn access() -> Box<dyn MidiAccess> {
    use seqmidi_io::{MemoryBackend, PortCapabilities, PortType};

    let backend = MemoryBackend::new();
    let keys = backend.add_client("Keystation");
    backend.add_port(
        keys,
        "Keystation MIDI 1",
        PortCapabilities::INPUT_REQUIRED,
        PortType::MIDI_GENERIC | PortType::HARDWARE,
    );
    let synth = backend.add_client("FluidSynth");
    backend.add_port(
        synth,
        "Synth input port",
        PortCapabilities::OUTPUT_REQUIRED,
        PortType::MIDI_GENERIC | PortType::SOFTWARE | PortType::SYNTHESIZER,
    );
    Box::new(seqmidi_io::SeqMidiAccess::new(backend))
}

fn main() {
    tracing_subscriber::fmt::init();

    let access = access();
    let inputs = access.inputs();
    let outputs = access.outputs();

    if std::env::args().any(|arg| arg == "--json") {
        let listing = serde_json::json!({ "inputs": inputs, "outputs": outputs });
        match serde_json::to_string_pretty(&listing) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to serialize port listing: {}", e),
        }
        return;
    }

    println!("{} MIDI access", access.name());
    print_ports("Inputs", &inputs);
    print_ports("Outputs", &outputs);
}
