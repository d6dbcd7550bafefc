//! Operator help text.

/// Printed by `help`, `h`, `?` and F1.
pub const HELP_TEXT: &str = "\
Local commands:
  end                         stop the program
  help | h | ?                this text
  info                        protocol version, battery, temperature, wifi
  key | joystick | string     switch input mode (Esc returns to string)
  dist <cm> | ang <deg>       key-mode move distance / turn angle
  watch [k1 k2 ...]           record telemetry keys (none = raw frames)
  watchperiod <s>             sample telemetry every <s> seconds (<= 0 off)
  state <n>                   print the next <n> telemetry frames
  log [flush|clear]           print or discard the watch log
  sleep <s>                   hold the script queue for <s> seconds
  script <file> [insert|append|replace]
                              load a script (default insert)
  debug <n>                   0 error, 1 info, 2 debug, 3 trace
  ready                       start motors, then joystick mode
Anything else is sent to the drone as typed, e.g. takeoff, land, up 50.
Text after # is a comment.

Keys (key and joystick mode):
  arrows, w/8 s/2 a/4 d/6     move / climb / turn
  c command   t takeoff   l land   p emergency   h/5 stop
  k key mode  j joystick  Esc string mode
  -/+ distance  / * angle  ?/F1 help  F2 one telemetry frame";
