//! Built-in demo program.

/// Scrolls "Hello World!" across the top row of the video buffer, leaving
/// a trail of underscores, flushing the display after every step.
///
/// Assumes the default 10240-byte address space (video buffer at 6144).
pub const HELLO_WORLD: &str = r#"
; jump over the string data
        addi r0, start
        jr r1
text:
        .word "____"
        .word "Hell"
        .word "o Wo"
        .word "rld!"

start:
        addi r0, text
        load r1, r10
        addi r1, 4
        load r1, r11
        addi r1, 4
        load r1, r12
        addi r1, 4
        load r1, r13

        addi r0, 6144       ; cursor: first byte of row 0
        add r1, r0, r16
        addi r0, 6176       ; stop after 32 steps
        add r1, r0, r15
        addi r0, loop
        add r1, r0, r17
        addi r0, done
        add r1, r0, r18

loop:
        sub r15, r16, r1
        bz r18
        store r16, r10      ; trail under the cursor
        addi r16, 1
        add r1, r0, r16     ; cursor += 1
        store r1, r11
        addi r1, 4
        store r1, r12
        addi r1, 4
        store r1, r13
        flush
        jr r17

done:
        halt
"#;
