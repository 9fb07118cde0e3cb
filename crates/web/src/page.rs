//! The counter page, compiled into the binary
//!
//! One display element and two always-enabled controls. The page script
//! funnels every activation through a promise chain, so a rapid burst of
//! clicks is applied strictly in order and the display only ever shows a
//! value the counter actually held. `window.counterSettled()` resolves once
//! everything issued so far has been applied and drawn; the stress scenario
//! in the e2e suite awaits it.

/// The complete counter page. Served at `/`.
pub const COUNTER_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Tally</title>
  <style>
    body {
      font-family: system-ui, sans-serif;
      display: flex;
      min-height: 100vh;
      margin: 0;
      align-items: center;
      justify-content: center;
      background: #f7f7f8;
      color: #1c1c1e;
    }
    main { text-align: center; }
    h1 { font-size: 1.25rem; font-weight: 600; letter-spacing: 0.05em; }
    #counter {
      font-size: 4rem;
      font-variant-numeric: tabular-nums;
      margin: 0.5rem 0 1rem;
    }
    button {
      font-size: 1.5rem;
      min-width: 3.5rem;
      padding: 0.25rem 1rem;
      margin: 0 0.25rem;
      border: 1px solid #c7c7cc;
      border-radius: 0.5rem;
      background: #ffffff;
      cursor: pointer;
    }
    button:active { background: #e5e5ea; }
  </style>
</head>
<body>
  <main>
    <h1>Tally</h1>
    <div id="counter" aria-live="polite">0</div>
    <button id="decrement-btn" type="button" aria-label="Decrement">&minus;</button>
    <button id="increment-btn" type="button" aria-label="Increment">+</button>
  </main>
  <script>
    (function () {
      var display = document.getElementById('counter');
      var queue = Promise.resolve();

      function render(value) {
        display.textContent = String(value);
      }

      function send(command) {
        return fetch('/api/counter/' + command, { method: 'POST' })
          .then(function (res) { return res.json(); })
          .then(function (outcome) { render(outcome.value); });
      }

      function enqueue(command) {
        queue = queue.then(function () { return send(command); });
        return queue;
      }

      document.getElementById('increment-btn').addEventListener('click', function () {
        enqueue('increment');
      });
      document.getElementById('decrement-btn').addEventListener('click', function () {
        enqueue('decrement');
      });

      // Resolves after every activation issued so far has been applied and
      // the display updated.
      window.counterSettled = function () { return queue; };

      // Sync the display with the session state on load.
      queue = queue.then(function () {
        return fetch('/api/counter')
          .then(function (res) { return res.json(); })
          .then(function (snapshot) { render(snapshot.value); });
      });
    })();
  </script>
</body>
</html>
"#;
