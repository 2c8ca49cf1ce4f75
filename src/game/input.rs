use super::constants::MAX_PLAYERS;

pub const KEY_ESCAPE: u8 = 0x1b;

/// Per-player action flags decoded from one batch of terminal bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub quit: bool,
    pub restart: bool,
    pub pause_toggle: bool,
    pub move_up: bool,
    pub move_down: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub any_key: bool,
}

impl InputState {
    pub fn wants_direction(&self) -> bool {
        self.move_up
            || self.move_down
            || self.move_left
            || self.move_right
            || self.turn_left
            || self.turn_right
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerKeys {
    pub left: Option<u8>,
    pub right: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    pub quit: u8,
    pub restart: u8,
    pub pause: u8,
    pub players: [PlayerKeys; MAX_PLAYERS],
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            quit: KEY_ESCAPE,
            restart: b'r',
            pause: b'p',
            players: [
                PlayerKeys::default(),
                PlayerKeys {
                    left: Some(b'w'),
                    right: Some(b'q'),
                },
                PlayerKeys {
                    left: Some(b't'),
                    right: Some(b'y'),
                },
                PlayerKeys {
                    left: Some(b'o'),
                    right: Some(b'p'),
                },
            ],
        }
    }
}

fn matches(byte: u8, key: u8) -> bool {
    byte.to_ascii_lowercase() == key.to_ascii_lowercase()
}

/// Decodes a batch of terminal bytes into one `InputState` per player.
///
/// Arrow sequences steer every player. For players after the first the key
/// bound as "left" turns right and the "right" key turns left; existing
/// configs depend on that mapping.
pub fn decode(bytes: &[u8], bindings: &KeyBindings, num_players: usize) -> Vec<InputState> {
    let count = num_players.min(MAX_PLAYERS);
    let mut states = vec![InputState::default(); count];
    let mut index = 0;

    while index < bytes.len() {
        let byte = bytes[index];

        if byte == KEY_ESCAPE && index + 2 < bytes.len() && bytes[index + 1] == b'[' {
            let code = bytes[index + 2];
            for state in states.iter_mut() {
                match code {
                    b'A' => state.move_up = true,
                    b'B' => state.move_down = true,
                    b'C' => state.move_right = true,
                    b'D' => state.move_left = true,
                    _ => {}
                }
                state.any_key = true;
            }
            index += 3;
            continue;
        }

        index += 1;
        if byte == b'\r' || byte == b'\n' {
            continue;
        }

        for (player, state) in states.iter_mut().enumerate() {
            state.any_key = true;
            let keys = bindings.players[player];
            let left = keys.left.map_or(false, |key| matches(byte, key));
            let right = keys.right.map_or(false, |key| matches(byte, key));
            if player == 0 {
                state.turn_left |= left;
                state.turn_right |= right && !left;
            } else {
                state.turn_right |= left;
                state.turn_left |= right && !left;
            }
        }

        let quit = matches(byte, bindings.quit);
        let restart = !quit && matches(byte, bindings.restart);
        let pause = !quit && !restart && matches(byte, bindings.pause);
        for state in states.iter_mut() {
            state.quit |= quit;
            state.restart |= restart;
            state.pause_toggle |= pause;
        }
    }

    states
}
