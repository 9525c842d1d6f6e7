use state_machines::state_machine;

state_machine! {
    name: IngestionMachine,
    state: IngestionStage,
    initial: Ready,
    states: [Ready, Extracted, Chunked, Embedded, Indexed],
    events {
        extract { transition: { from: Ready, to: Extracted } }
        chunk { transition: { from: Extracted, to: Chunked } }
        embed { transition: { from: Chunked, to: Embedded } }
        index { transition: { from: Embedded, to: Indexed } }
    }
}

pub fn ready() -> IngestionMachine<(), Ready> {
    IngestionMachine::new(())
}
